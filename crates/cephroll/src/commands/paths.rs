use cephroll_core::release::resolve_ceph_release;

use crate::context::Context;

pub fn run(ctx: &Context, source: Option<&str>) -> i32 {
    for line in ctx.config.upgrade_paths().lines() {
        println!("{line}");
    }
    if let Some(source) = source {
        match resolve_ceph_release(source) {
            Some(release) => println!("{source} provides {release}"),
            None => {
                println!("{source}: unknown release");
                return 1;
            }
        }
    }
    0
}
