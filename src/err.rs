error_chain!{
    types{
        Error, ErrorKind, ResultExt, Result;
    }

    links {

    }

    foreign_links{
        Io(::std::io::Error);
    }

    errors{
        InvalidSliceLength(expected: usize, actual: usize, ttype: &'static str) {
            description("Invalid slice length received."),
            display("Expected '{}' but got '{}' bytes for '{}'.", expected, actual, ttype),
        }

        UnknownValue(val: u64, ttype: &'static str) {
            description("Encountered unknown value."),
            display("Encountered unknown value '{}' for type '{}'.", val, ttype),
        }

        IllegalValue(val: u64, ttype: &'static str) {
            description("Encountered illegal value."),
            display("Encountered illegal value '{}' for type '{}'.", val, ttype),
        }

        BadLength(len: usize, ttype: &'static str) {
            description("Length field does not fit the encoded structure."),
            display("Length '{}' is not valid for '{}'.", len, ttype),
        }

        TruncatedMessage(needed: usize, available: usize, ttype: &'static str) {
            description("Message ended before the structure was complete."),
            display("Needed '{}' bytes but only '{}' are left for '{}'.", needed, available, ttype),
        }

        BufferTooSmall(needed: usize, available: usize) {
            description("Output buffer is too small."),
            display("Packing needs '{}' bytes but the buffer holds '{}'.", needed, available),
        }

        UnknownField(class: u16, field: u8) {
            description("Unknown OXM class/field pair."),
            display("No OXM field '{}' is known in class '{:#06x}'.", field, class),
        }

        BadMatchType(ttype: u16) {
            description("Unexpected match type."),
            display("Match type '{}' is not an OXM match.", ttype),
        }

        BucketTooShort(len: u16) {
            description("Bucket length is smaller than the bucket header."),
            display("Bucket length '{}' is smaller than the bucket header.", len),
        }

        UnsupportedInVersion(what: String, version: u8) {
            description("Element is not available in this protocol version."),
            display("'{}' is not available in OpenFlow wire version '{}'.", what, version),
        }

        FieldNotFound(field: String) {
            description("Match field is not set."),
            display("Match field '{}' is not set.", field),
        }

        UnsupportedFeature(what: &'static str) {
            description("Feature is not implemented."),
            display("'{}' is not implemented.", what),
        }

        VersionIncompatible(version: u8) {
            description("No common protocol version with peer."),
            display("Peer HELLO (wire version '{}') shares no protocol version with us.", version),
        }

        PermissionDenied(version: u8) {
            description("Peer versions are excluded by local configuration."),
            display("Peer HELLO (wire version '{}') only offers versions we are not permitted to use.", version),
        }

        NoTransactionIdAvailable(pending: usize) {
            description("Transaction id space exhausted."),
            display("No transaction id available, '{}' transactions pending.", pending),
        }

        NotEstablished {
            description("Connection is not established."),
            display("Connection has not negotiated a protocol version yet."),
        }
    }
}
