pub mod codec;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod national_id;
pub mod protocol;
