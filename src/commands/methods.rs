use secretgate::gateway::MethodRegistry;

pub fn run() {
    for name in MethodRegistry::new().method_names() {
        println!("{}", name);
    }
}
