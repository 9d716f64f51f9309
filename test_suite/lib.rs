mod helpers;
mod identifier;
mod memory;
mod postgres;
mod scenarios;
