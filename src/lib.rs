//! Real-time Seoul subway train positions.
//!
//! [`sst_requester::Requester`] retrieves the XML feed for a line,
//! [`sst_models::SSTModels::parse_xml_data`] turns it into train records and
//! [`sst_views::SSTViews::render`] maps them to display cards. The
//! [`sst_controllers::Tracker`] chains the three and falls back to sample data
//! when anything fails.

pub mod sst_config;
pub mod sst_controllers;
pub mod sst_models;
pub mod sst_requester;
pub mod sst_views;
