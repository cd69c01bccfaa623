pub mod health;
pub mod staff;
pub mod student;
