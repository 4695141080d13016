pub mod clips;
pub mod episodes;
pub mod health;
pub mod jobs;

pub use clips::{discover_clips, list_clips};
pub use episodes::{delete_episode, discover_episodes, get_episode, list_episodes, submit_process_job};
pub use health::health;
pub use jobs::{cancel_job, get_job, list_jobs, queue_stats, submit_discover_clips_job, submit_render_clips_job};
