fn main() {
    if let Err(err) = baseline::cli::run() {
        baseline::ui::eprintln_error(&err);
        std::process::exit(baseline::exit::exit_code(&err));
    }
}
