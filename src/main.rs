fn main() {
    if let Err(e) = healthinsight_lib::run() {
        eprintln!("healthinsight: {e}");
        std::process::exit(1);
    }
}
