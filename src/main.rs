fn main() {
    neon_backdrop::run();
}
