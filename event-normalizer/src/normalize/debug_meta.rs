use serde_json::Value;

use crate::normalize::discriminate::{image_variant, ImageVariant};
use crate::normalize::fields::Fields;
use crate::normalize::path::FieldPath;
use crate::normalize::{coerce, rules, shape, ProcessingState};
use crate::protocol::{
    AppleDebugImage, DebugImage, DebugMeta, NativeDebugImage, ProguardDebugImage, SystemSdkInfo,
};

pub fn debug_meta(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<DebugMeta> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    Some(DebugMeta {
        images: f.get("images", state, images),
        sdk_info: f.get("sdk_info", state, sdk_info),
        other: f.into_other(),
    })
}

fn images(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Vec<DebugImage>> {
    let items = shape::array(value, path, state)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if item.is_null() {
            continue;
        }
        if let Some(image) = image(item, &path.index(out.len()), state) {
            out.push(image);
        }
    }
    Some(out)
}

pub fn image(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<DebugImage> {
    let map = shape::object(value, path, state)?;

    let Some(variant) = image_variant(&map) else {
        return Some(DebugImage::Other(map));
    };

    let mut f = Fields::new(map, path.clone());
    f.take("type");

    let image = match variant {
        ImageVariant::Apple => DebugImage::Apple(Box::new(AppleDebugImage {
            name: f.get("name", state, coerce::string),
            arch: f.get("arch", state, coerce::string),
            cpu_type: f.get("cpu_type", state, coerce::u64),
            cpu_subtype: f.get("cpu_subtype", state, coerce::u64),
            image_addr: f.get("image_addr", state, coerce::addr),
            image_size: f.get("image_size", state, coerce::u64),
            image_vmaddr: f.get("image_vmaddr", state, coerce::addr),
            uuid: f.get("uuid", state, coerce::string),
            other: f.into_other(),
        })),
        ImageVariant::Native(kind) => {
            let mut image = NativeDebugImage::new(kind);
            image.code_file = f.get("code_file", state, coerce::string);
            image.code_id = f.get("code_id", state, coerce::code_id);
            image.debug_file = f.get("debug_file", state, coerce::string);
            image.debug_id = f.get("debug_id", state, coerce::debug_id);
            image.arch = f.get("arch", state, coerce::string);
            image.image_addr = f.get("image_addr", state, coerce::addr);
            image.image_size = f.get("image_size", state, coerce::u64);
            image.image_vmaddr = f.get("image_vmaddr", state, coerce::addr);
            image.other = f.into_other();
            DebugImage::Native(Box::new(image))
        }
        ImageVariant::Proguard => DebugImage::Proguard(Box::new(ProguardDebugImage {
            uuid: f.get("uuid", state, coerce::string),
            other: f.into_other(),
        })),
    };

    rules::apply(image, path, state)
}

fn sdk_info(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<SystemSdkInfo> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    Some(SystemSdkInfo {
        sdk_name: f.get("sdk_name", state, coerce::string),
        version_major: f.get("version_major", state, coerce::u64),
        version_minor: f.get("version_minor", state, coerce::u64),
        version_patchlevel: f.get("version_patchlevel", state, coerce::u64),
        other: f.into_other(),
    })
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::normalize::NormalizeConfig;

    #[test]
    fn images_are_discriminated_and_validated() {
        let mut state = ProcessingState::new(&NormalizeConfig::default());
        let meta = debug_meta(
            json!({
                "images": [
                    {"type": "elf", "code_id": "57898E12145000", "debug_id": "128E89573414D0001DC8B2B8A8BEF4B7", "image_addr": "0x7f5140527000"},
                    {"type": "macho", "code_file": "/usr/lib/libsystem.dylib"},
                    null,
                    {"type": "pe", "debug_id": "3249D99D-0C40-4931-8610-F4E4FB0B6936-1", "image_size": "4096"},
                    {"type": "apple", "name": "/usr/lib/dyld", "image_addr": "0x1000"},
                    {"type": "wasm", "anything": [1, 2]},
                    {"type": "proguard", "uuid": "395835f4-03e0-4436-80d3-136f0749a893"},
                ],
                "sdk_info": {"sdk_name": "iOS", "version_major": 17, "version_minor": 2},
            }),
            &FieldPath::root().key("debug_meta"),
            &mut state,
        )
        .unwrap();

        let images = meta.images.unwrap();
        assert_eq!(images.len(), 5);
        assert_eq!(
            serde_json::to_value(&images[0]).unwrap(),
            json!({
                "type": "elf",
                "code_id": "57898e12145000",
                "debug_id": "128e8957-3414-d000-1dc8-b2b8a8bef4b7",
                "image_addr": "0x7f5140527000",
            })
        );
        assert_eq!(images[1].image_type(), Some("pe"));
        assert_eq!(images[2].image_type(), Some("apple"));
        assert_eq!(images[3].image_type(), None);
        assert_eq!(images[4].image_type(), Some("proguard"));

        let errors = state.into_errors();
        assert_eq!(errors.len(), 3);
        // macho without debug_id
        assert_eq!(errors[0].name.as_deref(), Some("debug_meta.images.1"));
        assert_eq!(errors[0].kind, ErrorKind::MissingAttribute);
        // pe without code_file
        assert_eq!(errors[1].name.as_deref(), Some("debug_meta.images.1"));
        // apple without image_size
        assert_eq!(errors[2].name.as_deref(), Some("debug_meta.images.2"));
    }
}
