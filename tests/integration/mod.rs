pub mod test_utils;

mod cli_routes;
mod lifecycle;
