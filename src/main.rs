fn main() {
    if let Err(err) = plate_designer::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
