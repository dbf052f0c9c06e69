pub mod inverter;
pub mod registers;
