#![no_main]
use libfuzzer_sys::fuzz_target;

use h5describe_format::data_layout::DataLayout;
use h5describe_format::dataspace::Dataspace;
use h5describe_format::filter_pipeline::FilterPipeline;
use h5describe_format::link_message::LinkMessage;

fuzz_target!(|data: &[u8]| {
    for size in [2u8, 4, 8] {
        let _ = Dataspace::parse(data, size);
        let _ = DataLayout::parse(data, size, size);
        let _ = LinkMessage::parse(data, size);
    }
    let _ = FilterPipeline::parse(data);
});
