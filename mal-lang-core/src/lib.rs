pub mod environment;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod value;
