pub mod media_type;
