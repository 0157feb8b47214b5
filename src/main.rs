use env_logger::Env;

mod audio;
mod authority;
mod config;
mod coordinator;
mod library;
mod mpris;
mod observable;
mod runtime;
mod session;

#[cfg(test)]
mod testing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    runtime::run()
}
