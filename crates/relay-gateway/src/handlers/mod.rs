mod billing;
mod cost;
mod health;
mod models;
mod realtime;
mod relay;

pub use billing::consume_token;
pub use cost::request_cost;
pub use health::{health_live, health_ready};
pub use models::list_models;
pub use realtime::realtime_upgrade;
pub use relay::{
    audio_speech, audio_transcription, audio_translation, cancel_response, chat_completions,
    delete_response, get_response, image_edits, image_generations, messages, responses,
};
