fn main() -> Result<(), Box<dyn std::error::Error>> {
    beatline::runtime::run()
}
