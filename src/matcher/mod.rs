pub mod matcher;
pub mod vocabulary;
