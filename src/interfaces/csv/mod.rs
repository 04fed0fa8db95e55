pub mod chat_reader;
pub mod salary_writer;
