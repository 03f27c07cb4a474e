pub mod document;
pub mod hex_stripper;
pub mod orchestrator;
pub mod text_stripper;
