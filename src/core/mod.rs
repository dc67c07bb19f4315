// Core module - Bridge session logic
pub mod bridge;
