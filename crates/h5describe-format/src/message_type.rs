//! Object header message type identifiers.

macro_rules! message_types {
    ($($(#[$doc:meta])* $name:ident = $id:literal,)*) => {
        /// Header message types the reader acts on.
        ///
        /// Everything else is carried as [`MessageType::Other`] and skipped
        /// unless its must-understand flag is set.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum MessageType {
            $($(#[$doc])* $name,)*
            /// Any other type, with its raw ID.
            Other(u16),
        }

        impl From<u16> for MessageType {
            fn from(id: u16) -> MessageType {
                match id {
                    $($id => MessageType::$name,)*
                    other => MessageType::Other(other),
                }
            }
        }

        impl MessageType {
            /// The raw type ID as stored in the file.
            pub fn id(self) -> u16 {
                match self {
                    $(MessageType::$name => $id,)*
                    MessageType::Other(id) => id,
                }
            }
        }
    };
}

message_types! {
    Nil = 0x0000,
    Dataspace = 0x0001,
    /// Present in every new-style group.
    LinkInfo = 0x0002,
    Datatype = 0x0003,
    Link = 0x0006,
    ExternalDataFiles = 0x0007,
    DataLayout = 0x0008,
    FilterPipeline = 0x000B,
    ObjectHeaderContinuation = 0x0010,
    /// Old-style group: B-tree and local heap addresses.
    SymbolTable = 0x0011,
}
