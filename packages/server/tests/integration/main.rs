mod common;
mod files;
mod gc;
