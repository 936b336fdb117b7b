pub mod band;
pub mod comment;
pub mod email_verification;
pub mod event;
pub mod like;
pub mod media_blob;
pub mod member;
pub mod post;
pub mod report;
pub mod user;
