pub mod cmd;
pub mod config;
pub mod dumpsys;
pub mod input;
pub mod launch;
pub mod notice;
pub mod pm;
pub mod prefs;
pub mod ui;
pub mod uninstall;
