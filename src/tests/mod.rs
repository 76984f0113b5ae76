pub mod builder;

mod conversion;
