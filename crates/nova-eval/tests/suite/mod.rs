mod arithmetic;
mod config;
mod correlator;
mod session;
mod variables;
