fn main() {
    if let Err(err) = diagrammer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
