pub mod modbus;
pub mod utils;
