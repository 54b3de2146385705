pub mod scanner;

pub use scanner::HciScanner;
