pub mod chat_generator;
pub mod completed;
pub mod element_tree;
pub mod schedule_document;
pub mod storage;
