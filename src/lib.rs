//! Horoscope mailer: generate a daily horoscope and email it, once per run.

pub mod astro;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod generator;
pub mod job;
pub mod llm;
pub mod mail;
pub mod prompt;
