use par_mux::cli;

fn main() {
    let code = cli::process_cli();
    log::logger().flush();
    if code != 0 {
        std::process::exit(code);
    }
}
