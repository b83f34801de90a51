#![no_main]
use libfuzzer_sys::fuzz_target;

use h5describe_format::group;
use h5describe_format::signature::find_signature;
use h5describe_format::superblock::Superblock;

fuzz_target!(|data: &[u8]| {
    let Ok(offset) = find_signature(data) else {
        return;
    };
    let Ok(sb) = Superblock::parse(data, offset) else {
        return;
    };
    let _ = group::list_links(data, &sb, sb.root_group_address);
    let _ = group::resolve(data, &sb, "/entry/data");
});
