//! Proto definitions for the mock support server.
//!
//! Generated message types and tonic server/client stubs for the three
//! services the mock exposes. Module nesting mirrors the protobuf packages so
//! cross-package references resolve. Every message implements
//! [`prost_reflect::ReflectMessage`] against [`DESCRIPTOR_POOL`].

use once_cell::sync::Lazy;
use prost_reflect::DescriptorPool;

pub mod confidence {
    pub mod iam {
        pub mod v1 {
            tonic::include_proto!("confidence.iam.v1");
        }
    }

    pub mod flags {
        pub mod resolver {
            pub mod v1 {
                tonic::include_proto!("confidence.flags.resolver.v1");

                pub mod events {
                    tonic::include_proto!("confidence.flags.resolver.v1.events");
                }
            }
        }
    }
}

// Re-export commonly used packages for convenience
pub use confidence::flags::resolver::v1 as resolver;
pub use confidence::iam::v1 as iam;

/// Encoded descriptors for every compiled file and its imports
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("mock_descriptor");

/// Descriptor pool for prost-reflect
pub static DESCRIPTOR_POOL: Lazy<DescriptorPool> = Lazy::new(|| {
    DescriptorPool::decode(FILE_DESCRIPTOR_SET).expect("descriptor set generated by build.rs")
});

#[cfg(test)]
mod tests {
    use super::*;
    use prost_reflect::ReflectMessage;

    #[test]
    fn test_messages_resolve_in_pool() {
        let request = resolver::WriteFlagLogsRequest::default();
        assert_eq!(
            request.descriptor().full_name(),
            "confidence.flags.resolver.v1.WriteFlagLogsRequest"
        );
        assert!(DESCRIPTOR_POOL
            .get_message_by_name("google.protobuf.Timestamp")
            .is_some());
    }
}
