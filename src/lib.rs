pub mod aggregation;
pub mod block;
pub mod codegen;
pub mod config;
pub mod error;
pub mod expression;
pub mod function;
pub mod operator;
pub mod page;
pub mod session;
pub mod signature;
pub mod types;
