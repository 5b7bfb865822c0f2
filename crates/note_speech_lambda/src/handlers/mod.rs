pub mod convert;
pub mod upload_url;
