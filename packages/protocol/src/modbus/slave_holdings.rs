use super::{
    header::RequestFrame,
    response::{ExceptionCode, ExceptionFrame, ResponseFrame, SlaveReply},
    MAX_READ_REGISTERS, READ_HOLDING_REGISTERS,
};
use crate::storage::RegisterBank;

/// Answer one decoded request against the register bank.
///
/// Returns `None` when the request is addressed to another unit: RTU slaves stay
/// silent for frames that are not theirs.
pub fn build_slave_holdings_reply(
    request: &RequestFrame,
    bank: &RegisterBank,
    unit_id: u8,
) -> Option<SlaveReply> {
    if request.unit_id != unit_id {
        log::debug!(
            "Ignoring request for unit {} (configured unit {unit_id})",
            request.unit_id
        );
        return None;
    }

    if request.function_code != READ_HOLDING_REGISTERS {
        log::warn!(
            "Unsupported function code: 0x{:02X}",
            request.function_code
        );
        return Some(SlaveReply::Exception(ExceptionFrame::new(
            request.unit_id,
            request.function_code,
            ExceptionCode::IllegalFunction,
        )));
    }

    if request.register_count > MAX_READ_REGISTERS {
        log::warn!(
            "Rejecting read of {} registers, a reply holds at most {MAX_READ_REGISTERS}",
            request.register_count
        );
        return Some(SlaveReply::Exception(ExceptionFrame::new(
            request.unit_id,
            request.function_code,
            ExceptionCode::IllegalDataAddress,
        )));
    }

    match bank.read(request.start_address, request.register_count) {
        Ok(values) => Some(SlaveReply::Registers(ResponseFrame {
            unit_id: request.unit_id,
            function_code: request.function_code,
            values,
        })),
        Err(err) => {
            log::warn!("Rejecting read request: {err}");
            Some(SlaveReply::Exception(ExceptionFrame::new(
                request.unit_id,
                request.function_code,
                ExceptionCode::IllegalDataAddress,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_bank() -> RegisterBank {
        let bank = RegisterBank::new(11);
        bank.write(0, &[2024, 1, 15, 10, 30, 0, 205, 621, 134, 1800, 12])
            .unwrap();
        bank
    }

    fn read_request(start_address: u16, register_count: u16) -> RequestFrame {
        RequestFrame {
            unit_id: 1,
            function_code: READ_HOLDING_REGISTERS,
            start_address,
            register_count,
        }
    }

    #[test]
    fn test_read_whole_bank() {
        let reply = build_slave_holdings_reply(&read_request(0, 11), &weather_bank(), 1);
        match reply {
            Some(SlaveReply::Registers(frame)) => {
                assert_eq!(frame.byte_count(), 22);
                assert_eq!(
                    frame.values,
                    vec![2024, 1, 15, 10, 30, 0, 205, 621, 134, 1800, 12]
                );
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_read_window() {
        let reply = build_slave_holdings_reply(&read_request(6, 2), &weather_bank(), 1);
        let Some(SlaveReply::Registers(frame)) = reply else {
            panic!("expected register reply, got {reply:?}");
        };
        assert_eq!(frame.values, vec![205, 621]);
    }

    #[test]
    fn test_out_of_range_is_illegal_data_address() {
        let bank = weather_bank();
        for (start, count) in [(0, 12), (10, 2), (11, 1), (0, 0), (0xFFFF, 2)] {
            let reply = build_slave_holdings_reply(&read_request(start, count), &bank, 1);
            assert_eq!(
                reply,
                Some(SlaveReply::Exception(ExceptionFrame {
                    unit_id: 1,
                    function_code: 0x83,
                    exception_code: ExceptionCode::IllegalDataAddress,
                })),
                "start={start} count={count}"
            );
        }
    }

    #[test]
    fn test_read_longer_than_one_reply_is_rejected() {
        // a bank larger than one reply can carry
        let bank = RegisterBank::new(200);
        let reply = build_slave_holdings_reply(&read_request(0, 126), &bank, 1);
        assert_eq!(
            reply,
            Some(SlaveReply::Exception(ExceptionFrame {
                unit_id: 1,
                function_code: 0x83,
                exception_code: ExceptionCode::IllegalDataAddress,
            }))
        );

        let Some(SlaveReply::Registers(frame)) =
            build_slave_holdings_reply(&read_request(0, 125), &bank, 1)
        else {
            panic!("expected registers");
        };
        assert_eq!(frame.byte_count(), 250);
        assert_eq!(frame.encode().len(), 3 + 250 + 2);
    }

    #[test]
    fn test_unsupported_function_is_illegal_function() {
        let request = RequestFrame {
            function_code: 0x06,
            ..read_request(1, 10)
        };
        let reply = build_slave_holdings_reply(&request, &weather_bank(), 1);
        assert_eq!(
            reply,
            Some(SlaveReply::Exception(ExceptionFrame {
                unit_id: 1,
                function_code: 0x86,
                exception_code: ExceptionCode::IllegalFunction,
            }))
        );
    }

    #[test]
    fn test_other_unit_is_ignored() {
        let request = RequestFrame {
            unit_id: 2,
            ..read_request(0, 1)
        };
        assert_eq!(build_slave_holdings_reply(&request, &weather_bank(), 1), None);

        // not even an exception for unknown functions
        let request = RequestFrame {
            unit_id: 0,
            function_code: 0x10,
            ..read_request(0, 1)
        };
        assert_eq!(build_slave_holdings_reply(&request, &weather_bank(), 1), None);
    }
}
