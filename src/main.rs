fn main() {
    if let Err(err) = gemup::cli::run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}
