mod proxy;
mod utils;
mod versions;
mod workspace;
