fn main() {
    if let Err(err) = studyfocus::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
