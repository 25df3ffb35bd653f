use vergen::EmitBuilder;

fn main() {
    // 生成构建信息，供 --version 展示；非 git 环境下只给出警告
    if let Err(e) = EmitBuilder::builder().all_build().all_git().emit() {
        println!("cargo:warning=无法生成构建信息: {}", e);
    }
}
