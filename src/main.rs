fn main() {
    chat4ba_lib::run()
}
