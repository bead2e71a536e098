pub const MAP_PAGE_HTML: &str = r#"
<!doctype html>
<html lang="en">

<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Earthquake Map</title>

  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css"
    integrity="sha256-p4NxAoJBhIIN+hmNHrzRCf9tD/miZyoHS5obTRR9BMY=" crossorigin="" />
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"
    integrity="sha256-20nQCchB9co0qIjJZRGuk2/Z9VM+kNiyxNV1lvTlZBo=" crossorigin=""></script>

  <style>
    html, body { height: 100%; margin: 0; font-family: system-ui, sans-serif; }
    #map { position: absolute; inset: 0; }
    .info.legend {
      background: rgba(255, 255, 255, 0.9);
      padding: 6px 10px;
      border-radius: 4px;
      line-height: 20px;
      color: #333;
    }
    .info.legend i {
      width: 18px;
      height: 18px;
      float: left;
      margin-right: 8px;
      opacity: 0.9;
      border: 1px solid #000;
    }
    .time-control {
      background: rgba(255, 255, 255, 0.9);
      padding: 6px 10px;
      border-radius: 4px;
      min-width: 260px;
    }
    .time-control input { width: 100%; }
    .time-control .buttons { display: flex; gap: 4px; margin-bottom: 4px; }
    .time-control .label { font-size: 12px; color: #333; }
  </style>
</head>

<body>
  <div id="map"></div>

  <script>
    (function () {
      const map = L.map('map', { center: [__CENTER_LAT__, __CENTER_LON__], zoom: __ZOOM__ });
      const legendHtml = '__LEGEND_HTML__';

      const control = L.control.layers({}, {}).addTo(map);
      const state = {
        baseReady: false,
        earthquakes: null,
        faults: null,
        times: [],
      };

      const legend = L.control({ position: 'bottomright' });
      legend.onAdd = function () {
        const div = L.DomUtil.create('div', 'info legend');
        div.innerHTML = legendHtml;
        return div;
      };
      legend.addTo(map);

      map.on('overlayadd', function () {
        if (state.earthquakes && map.hasLayer(state.earthquakes)) {
          state.earthquakes.bringToFront();
        }
      });

      function quakeLayer() {
        return L.geoJSON(null, {
          pointToLayer: function (feature, latlng) {
            return L.circleMarker(latlng, feature.properties.style);
          },
          onEachFeature: function (feature, layer) {
            const popup = feature.properties.popup;
            if (!popup) {
              return;
            }
            layer.bindPopup(popup);
            layer.on('mouseover', function () { this.openPopup(); });
            layer.on('mouseout', function () { this.closePopup(); });
          },
        });
      }

      async function loadQuakes(until) {
        const query = until === undefined ? '' : '?until=' + encodeURIComponent(until);
        const response = await fetch('/api/earthquakes' + query);
        if (response.status !== 200) {
          return null;
        }
        return response.json();
      }

      async function showQuakesAt(until) {
        const collection = await loadQuakes(until);
        if (!collection || !state.earthquakes) {
          return;
        }
        state.earthquakes.clearLayers();
        state.earthquakes.addData(collection);
        const label = document.querySelector('.time-control .label');
        if (label) {
          label.textContent = collection.timeLabel || 'unknown time';
        }
      }

      function addTimeControl(times, current) {
        if (times.length === 0) {
          return;
        }
        const slider = L.control({ position: 'bottomleft' });
        slider.onAdd = function () {
          const div = L.DomUtil.create('div', 'time-control');
          const buttons = L.DomUtil.create('div', 'buttons', div);
          const back = L.DomUtil.create('button', '', buttons);
          const play = L.DomUtil.create('button', '', buttons);
          const forward = L.DomUtil.create('button', '', buttons);
          back.textContent = '\u23EE';
          play.textContent = '\u25B6';
          forward.textContent = '\u23ED';
          const input = L.DomUtil.create('input', '', div);
          input.type = 'range';
          input.min = 0;
          input.max = times.length - 1;
          input.step = 1;
          input.value = Math.max(0, times.indexOf(current));
          L.DomUtil.create('div', 'label', div);
          L.DomEvent.disableClickPropagation(div);

          let timer = null;
          function stepTo(index) {
            const clamped = Math.min(times.length - 1, Math.max(0, index));
            input.value = clamped;
            showQuakesAt(times[clamped]);
            return clamped;
          }
          function stop() {
            if (timer !== null) {
              clearInterval(timer);
              timer = null;
            }
            play.textContent = '\u25B6';
          }

          input.addEventListener('input', function () {
            stop();
            stepTo(Number(input.value));
          });
          back.addEventListener('click', function () {
            stop();
            stepTo(Number(input.value) - 1);
          });
          forward.addEventListener('click', function () {
            stop();
            stepTo(Number(input.value) + 1);
          });
          play.addEventListener('click', function () {
            if (timer !== null) {
              stop();
              return;
            }
            if (Number(input.value) >= times.length - 1) {
              stepTo(0);
            }
            play.textContent = '\u23F8';
            timer = setInterval(function () {
              const index = Number(input.value);
              if (index >= times.length - 1) {
                stop();
                return;
              }
              stepTo(index + 1);
            }, 500);
          });
          return div;
        };
        slider.addTo(map);
      }

      function addBaseLayers(snapshot) {
        snapshot.base_layers.forEach(function (base) {
          const tiles = L.tileLayer(base.url, { maxZoom: 18 });
          control.addBaseLayer(tiles, base.name);
          if (base.active) {
            tiles.addTo(map);
          }
        });
        state.baseReady = true;
      }

      async function addEarthquakes(overlay, view) {
        state.earthquakes = quakeLayer().addTo(map);
        control.addOverlay(state.earthquakes, overlay.name);
        state.times = view.available_times;
        addTimeControl(view.available_times, view.current_time);
        await showQuakesAt(view.current_time === null ? undefined : view.current_time);
        state.earthquakes.bringToFront();
      }

      async function addFaults(overlay) {
        const response = await fetch('/api/faults');
        if (response.status !== 200) {
          return;
        }
        const collection = await response.json();
        state.faults = L.geoJSON(collection, {
          style: { color: 'orange', weight: 2 },
        }).addTo(map);
        control.addOverlay(state.faults, overlay.name);
        if (state.earthquakes) {
          state.earthquakes.bringToFront();
        }
      }

      async function poll() {
        let snapshot = null;
        try {
          const response = await fetch('/api/map');
          if (response.status === 200) {
            snapshot = await response.json();
          }
        } catch (err) {
          console.warn('map snapshot unavailable', err);
        }

        if (snapshot) {
          if (!state.baseReady) {
            addBaseLayers(snapshot);
          }
          for (const overlay of snapshot.overlays) {
            if (overlay.kind === 'earthquakes' && !state.earthquakes && snapshot.earthquakes) {
              await addEarthquakes(overlay, snapshot.earthquakes);
            } else if (overlay.kind === 'fault_lines' && !state.faults) {
              await addFaults(overlay);
            }
          }
        }

        const settled = snapshot && snapshot.complete;
        if (!settled && (!state.earthquakes || !state.faults)) {
          setTimeout(poll, 1000);
        }
      }

      poll();
    })();
  </script>
</body>

</html>
"#;
