//! Internal macros shared by the ASN.1 model modules.

/// Implements the `der` decode/encode plumbing for a newtype wrapping a
/// single ASN.1 type, so the wrapper is transparent on the wire.
///
/// Also provides `From` conversions in both directions.
macro_rules! impl_newtype {
    ($newtype:ty, $inner:ty) => {
        impl ::der::FixedTag for $newtype {
            const TAG: ::der::Tag = <$inner as ::der::FixedTag>::TAG;
        }

        impl<'a> ::der::DecodeValue<'a> for $newtype {
            fn decode_value<R: ::der::Reader<'a>>(
                reader: &mut R,
                header: ::der::Header,
            ) -> ::der::Result<Self> {
                Ok(Self(<$inner as ::der::DecodeValue<'a>>::decode_value(
                    reader, header,
                )?))
            }
        }

        impl ::der::EncodeValue for $newtype {
            fn value_len(&self) -> ::der::Result<::der::Length> {
                self.0.value_len()
            }

            fn encode_value(&self, writer: &mut impl ::der::Writer) -> ::der::Result<()> {
                self.0.encode_value(writer)
            }
        }

        impl From<$inner> for $newtype {
            fn from(inner: $inner) -> Self {
                Self(inner)
            }
        }

        impl From<$newtype> for $inner {
            fn from(outer: $newtype) -> Self {
                outer.0
            }
        }

        impl AsRef<$inner> for $newtype {
            fn as_ref(&self) -> &$inner {
                &self.0
            }
        }
    };
}
