//! API request and response data models.
//!
//! Every JSON body carries an `ok` flag; failures use [`crate::errors::ErrorBody`].

pub mod files;
