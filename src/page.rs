pub(super) const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Glasgow SIMD Crime Rank</title>
  <link
    rel="stylesheet"
    href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css"
    integrity="sha256-p4NxAoJBhIIN+hmNHrzRCf9tD/miZyoHS5obTRR9BMY="
    crossorigin=""
  />
  <style>
    html, body { height: 100%; margin: 0; padding: 0; background: #111; }
    #map { height: 100dvh; width: 100%; }
    .zone-popup strong { display: inline-block; min-width: 9em; }
  </style>
</head>
<body>
  <div id="map"></div>
  <script
    src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"
    integrity="sha256-20nQCchB9co0qIjJZRGuk2/Z9VM+kNiyxNV1lvTlZBo="
    crossorigin=""
  ></script>
  <script>
    (async () => {
      const style = await (await fetch("/api/style")).json();
      const toLatLng = ([lon, lat]) => [lat, lon];
      const bounds = L.latLngBounds(style.bounds.map(toLatLng));

      const map = L.map("map", {
        maxBounds: L.latLngBounds(style.maxBounds.map(toLatLng)),
        worldCopyJump: false,
      });
      map.fitBounds(bounds, { padding: [style.padding, style.padding] });

      L.tileLayer("https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png", {
        attribution: "&copy; OpenStreetMap contributors &copy; CARTO",
        noWrap: true,
      }).addTo(map);
      L.tileLayer("/tiles/{z}/{x}/{y}.png", { noWrap: true }).addTo(map);
      L.control.scale({ imperial: false }).addTo(map);

      const popup = L.popup({ closeOnClick: false, autoPan: false });
      const escape = (s) => String(s).replace(/[&<>"]/g, (c) => `&#${c.charCodeAt(0)};`);

      const show = async (e) => {
        const { lat, lng } = e.latlng;
        const res = await fetch(`/api/query?lat=${lat}&lon=${lng}`);
        const zone = await res.json();
        if (!zone) {
          map.closePopup(popup);
          return;
        }
        popup
          .setLatLng([zone.latitude, zone.longitude])
          .setContent(
            `<div class="zone-popup">` +
            `<strong>Data Zone:</strong> ${escape(zone.data_zone)}<br />` +
            `<strong>Name:</strong> ${escape(zone.name)}<br />` +
            `<strong>SIMD Crime Rank:</strong> ${zone.crime_rank ?? ""}<br />` +
            `</div>`
          )
          .openOn(map);
      };

      map.on("mousemove", show);
      map.on("click", show);
    })();
  </script>
</body>
</html>
"#;
