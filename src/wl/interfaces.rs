//! Schema tables for the core interfaces.

use crate::codec::ArgKind::{Enum, Fd, Int, NewId, Object, String, Uint};
use crate::interface::{Interface, MessageDesc};

/// `wl_display`: the root object, always id 1.
pub static WL_DISPLAY_INTERFACE: Interface = Interface {
    name: "wl_display",
    version: 1,
    requests: &[
        MessageDesc::new("sync", &[NewId]).child(&WL_CALLBACK_INTERFACE),
        MessageDesc::new("get_registry", &[NewId]).child(&WL_REGISTRY_INTERFACE),
    ],
    events: &[
        MessageDesc::new("error", &[Object, Uint, String]),
        MessageDesc::new("delete_id", &[Uint]),
    ],
};

/// `wl_registry`: announces globals and binds them.
///
/// `bind` carries an untyped new_id, which goes on the wire as interface
/// name, version and id.
pub static WL_REGISTRY_INTERFACE: Interface = Interface {
    name: "wl_registry",
    version: 1,
    requests: &[MessageDesc::new("bind", &[Uint, String, Uint, NewId])],
    events: &[
        MessageDesc::new("global", &[Uint, String, Uint]),
        MessageDesc::new("global_remove", &[Uint]),
    ],
};

/// `wl_callback`: one-shot completion notification.
pub static WL_CALLBACK_INTERFACE: Interface = Interface {
    name: "wl_callback",
    version: 1,
    requests: &[],
    events: &[MessageDesc::new("done", &[Uint]).destructor()],
};

/// `wl_compositor`: surface and region factory.
pub static WL_COMPOSITOR_INTERFACE: Interface = Interface {
    name: "wl_compositor",
    version: 6,
    requests: &[
        MessageDesc::new("create_surface", &[NewId]).child(&WL_SURFACE_INTERFACE),
        MessageDesc::new("create_region", &[NewId]).child(&WL_REGION_INTERFACE),
    ],
    events: &[],
};

/// `wl_surface`: a rectangle of pixels with buffer, damage and frame state.
pub static WL_SURFACE_INTERFACE: Interface = Interface {
    name: "wl_surface",
    version: 6,
    requests: &[
        MessageDesc::new("destroy", &[]).destructor(),
        MessageDesc::new("attach", &[Object, Int, Int]),
        MessageDesc::new("damage", &[Int, Int, Int, Int]),
        MessageDesc::new("frame", &[NewId]).child(&WL_CALLBACK_INTERFACE),
        MessageDesc::new("set_opaque_region", &[Object]),
        MessageDesc::new("set_input_region", &[Object]),
        MessageDesc::new("commit", &[]),
        MessageDesc::new("set_buffer_transform", &[Int]).since(2),
        MessageDesc::new("set_buffer_scale", &[Int]).since(3),
        MessageDesc::new("damage_buffer", &[Int, Int, Int, Int]).since(4),
        MessageDesc::new("offset", &[Int, Int]).since(5),
    ],
    events: &[
        MessageDesc::new("enter", &[Object]),
        MessageDesc::new("leave", &[Object]),
        MessageDesc::new("preferred_buffer_scale", &[Int]).since(6),
        MessageDesc::new("preferred_buffer_transform", &[Enum]).since(6),
    ],
};

/// `wl_region`: a set of rectangles for opaque and input regions.
pub static WL_REGION_INTERFACE: Interface = Interface {
    name: "wl_region",
    version: 1,
    requests: &[
        MessageDesc::new("destroy", &[]).destructor(),
        MessageDesc::new("add", &[Int, Int, Int, Int]),
        MessageDesc::new("subtract", &[Int, Int, Int, Int]),
    ],
    events: &[],
};

/// `wl_shm`: shared memory pool factory. Advertises pixel formats on bind.
pub static WL_SHM_INTERFACE: Interface = Interface {
    name: "wl_shm",
    version: 2,
    requests: &[
        MessageDesc::new("create_pool", &[NewId, Fd, Int]).child(&WL_SHM_POOL_INTERFACE),
        MessageDesc::new("release", &[]).since(2).destructor(),
    ],
    events: &[MessageDesc::new("format", &[Enum])],
};

/// `wl_shm_pool`: a shared memory file that buffers are carved from.
pub static WL_SHM_POOL_INTERFACE: Interface = Interface {
    name: "wl_shm_pool",
    version: 2,
    requests: &[
        MessageDesc::new("create_buffer", &[NewId, Int, Int, Int, Int, Enum])
            .child(&WL_BUFFER_INTERFACE),
        MessageDesc::new("destroy", &[]).destructor(),
        MessageDesc::new("resize", &[Int]),
    ],
    events: &[],
};

/// `wl_buffer`: pixel content attachable to a surface.
pub static WL_BUFFER_INTERFACE: Interface = Interface {
    name: "wl_buffer",
    version: 1,
    requests: &[MessageDesc::new("destroy", &[]).destructor()],
    events: &[MessageDesc::new("release", &[])],
};
