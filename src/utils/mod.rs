pub mod document;
pub mod gate;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod parser;
pub mod scoring;
