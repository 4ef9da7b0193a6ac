pub mod janitor;
pub mod jobs;
pub mod run;
