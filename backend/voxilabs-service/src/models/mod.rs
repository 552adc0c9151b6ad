//! Row types, request bodies and response projections

pub mod requests;
pub mod user;
pub mod video;

pub use requests::*;
pub use user::{AuthenticatedUser, NewUser, ProfileUpdate, PublicUser, Session, User};
pub use video::{
    DashboardStats, NewVideo, ProjectQuery, ProjectSort, ProjectSummary, Video, VideoResponse,
    VideoStatus, VideoTotals,
};
