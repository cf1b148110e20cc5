pub mod aliquot;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod gdc;
pub mod table;
pub mod variety;
pub mod vocabulary;
