#![no_main]
use libfuzzer_sys::fuzz_target;

use h5describe_format::data_read::DatasetInfo;
use h5describe_format::object_header::ObjectHeader;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = ObjectHeader::parse(data, 0, 8, 8) {
        if DatasetInfo::is_dataset(&header) {
            let _ = DatasetInfo::from_header(&header, 8, 8);
        }
    }
});
